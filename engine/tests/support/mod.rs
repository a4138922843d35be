pub mod mock_host;
pub mod undo_host;

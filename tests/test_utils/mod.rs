pub mod mock_server;

pub use mock_server::{MockResponse, spawn_mock_server, tcp_listener};

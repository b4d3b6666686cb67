#![allow(dead_code)]
pub mod helpers;
pub mod mock_gateway;
pub mod prepare_env;

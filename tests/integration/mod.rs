//! Integration tests for the datatag analytics beacon

mod dispatch_flow;
mod http_transport;
mod test_utils;

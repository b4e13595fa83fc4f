//! Generated protobuf messages and tonic stubs for `roombroker.v1`

tonic::include_proto!("roombroker.v1");

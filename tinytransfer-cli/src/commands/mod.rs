pub mod pack;
pub mod rpc;
pub mod scan;

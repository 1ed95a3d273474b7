pub mod abi;
pub mod ledger_client;
pub mod rpc_ledger_client;

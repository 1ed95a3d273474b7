pub mod oracle_registry;

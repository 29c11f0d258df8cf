pub mod exec_client;

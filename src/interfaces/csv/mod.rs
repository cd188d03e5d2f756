pub mod request_reader;
pub mod settlement_writer;

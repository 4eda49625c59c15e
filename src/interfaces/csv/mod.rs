pub mod refund_writer;

pub mod acquirer;

pub mod contributions;

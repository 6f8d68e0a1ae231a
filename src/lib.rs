pub mod hdw;

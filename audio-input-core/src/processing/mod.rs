pub mod shared_buffer;

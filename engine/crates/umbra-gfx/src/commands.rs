pub mod barrier;
pub mod command_buffer;
pub mod command_pool;
pub mod command_queue;
pub mod image_state;
pub mod label;
pub mod semaphore;
pub mod submit;

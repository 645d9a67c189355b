pub mod camera;
pub mod input_event;
pub mod input_state;

pub mod layout;
pub mod pipeline;
pub mod shader_module;

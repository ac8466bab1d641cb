// Disk image access: block I/O, GPT, fixed layout

pub mod block_io;
pub mod gpt_ops;
pub mod layout;
pub mod partition;

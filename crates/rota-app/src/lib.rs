pub mod events;
pub mod gui;
pub mod slices;
pub mod sys;

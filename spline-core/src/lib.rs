// Spline Core Library
// Document model, hit testing and pointer interaction for the Spline editor

pub mod color;
pub mod geometry;
pub mod layer;
pub mod change;
pub mod layer_tree;
pub mod selection;
pub mod hit_test;
pub mod document;
pub mod codec;
pub mod file_io;
pub mod config;
pub mod fling;
pub mod interaction;
pub mod controller;

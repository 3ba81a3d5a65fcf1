//! # Osmium HAL - Hardware Abstraction Layer
//!
//! This crate defines the processor-side abstractions for the Osmium
//! execution framework. Osmium models a single logical processor, so the
//! HAL surface is deliberately small: the mapping register that names
//! which address space is currently on the processor.
//!
//! ## Design Philosophy
//!
//! The HAL is designed to be:
//! - **Minimal**: Only exposes what the execution core needs
//! - **Explicit**: An unmapped processor is an observable "empty", never
//!   an error to propagate
//! - **Instantiable**: No global state; embedders own their registers

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]

pub mod mapping;

pub use mapping::MappingRegister;

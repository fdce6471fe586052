/*!
 * Driver Module
 * Dynamic binding to the vendor accelerator-management library
 */

pub mod binding;

pub use binding::DriverBinding;

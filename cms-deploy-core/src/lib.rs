#![doc = "cms-deploy-core: core logic library for cms-deploy."]

//! This crate holds the deployment pipeline for a CMS web solution: the
//! configuration model, destination and file-set computation, the contracts
//! for every external tool the pipeline drives, the named deployment tasks
//! and the step runner.
//!
//! # Usage
//! Build a [`config::DeployConfig`], a [`contract::Toolchain`] (the default
//! adapters live in [`adapters`]) and call [`pipeline::Pipeline::run`].

pub mod adapters;
pub mod config;
pub mod contract;
pub mod destination;
pub mod error;
pub mod fileset;
pub mod pipeline;
pub mod tasks;

//! Endpoint table
//!
//! Binds every conversion to its path and required method. Built once at startup and
//! never modified afterwards.

use hyper::Method;
use std::collections::HashMap;

use crate::convert::Conversion;

/// Static association of a path, its required method and its transform
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub path: &'static str,
    pub method: Method,
    pub conversion: Conversion,
}

impl Endpoint {
    pub const fn name(&self) -> &'static str {
        self.conversion.name()
    }
}

#[derive(Debug)]
pub struct EndpointTable {
    by_path: HashMap<&'static str, Endpoint>,
}

impl EndpointTable {
    pub fn new() -> Self {
        let by_path = Conversion::ALL
            .into_iter()
            .map(|conversion| {
                let endpoint = Endpoint {
                    path: conversion.path(),
                    method: Method::POST,
                    conversion,
                };
                (endpoint.path, endpoint)
            })
            .collect();
        Self { by_path }
    }

    /// Exact path lookup
    pub fn get(&self, path: &str) -> Option<&Endpoint> {
        self.by_path.get(path)
    }

    /// Registered paths in sorted order
    pub fn paths(&self) -> Vec<&'static str> {
        let mut paths: Vec<_> = self.by_path.keys().copied().collect();
        paths.sort_unstable();
        paths
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::new()
    }
}

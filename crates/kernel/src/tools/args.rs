// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared argument-decoding helper for tool handlers: every handler
//! deserializes its typed argument struct from the JSON-RPC `arguments`
//! value through this one entry point, so a malformed payload always
//! becomes the same `InvalidParams` error shape.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::KernelError;

pub fn decode<T: DeserializeOwned>(args: Value) -> Result<T, KernelError> {
    serde_json::from_value(args).map_err(|e| KernelError::invalid_params(e.to_string()))
}

// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

pub mod command;
pub mod frame_reader;
pub mod lx200_server;
pub mod mount;
pub mod mount_server;
pub mod response;
pub mod status_server;

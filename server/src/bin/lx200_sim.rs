// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use lx200_server::mount_server::server_main;

fn main() {
    server_main("LX200 Simulator",
                "Copyright (c) 2025 Steven Rosenthal smr@dt3.org.\n\
                 See LICENSE file in root directory for license terms.");
}

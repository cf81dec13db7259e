// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.
use std::fmt::Debug;
use std::io::Write;
use std::sync::{Arc, Mutex};

/// Where the tour reports to the user.
///
/// Each call writes one complete line, so lines of concurrent commands may interleave
/// but never tear.
pub trait Console: Debug + Send + Sync + 'static {
    /// Write one line.
    fn line(&self, line: &str);
}

/// Writes to the process stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutConsole;

impl Console for StdoutConsole {
    fn line(&self, line: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout leaves nobody to tell.
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
    }
}

/// Keeps every line in memory.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    lines: Arc<Mutex<Vec<String>>>,
}

impl BufferConsole {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines written so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lock poisoned").clone()
    }

    /// Drop the lines written so far.
    pub fn clear(&self) {
        self.lines.lock().expect("lock poisoned").clear();
    }
}

impl Console for BufferConsole {
    fn line(&self, line: &str) {
        self.lines
            .lock()
            .expect("lock poisoned")
            .push(line.to_string());
    }
}

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
use std::fmt;

/// A command of the tour menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `P`: upload the sample file.
    Upload,
    /// `L`: list blobs of the container.
    List,
    /// `G`: download the blob.
    Get,
    /// `D`: delete the blob.
    Delete,
    /// `E`: clean up and exit.
    Exit,
}

impl Command {
    /// Every command, in menu order.
    pub const ALL: [Command; 5] = [
        Command::Upload,
        Command::List,
        Command::Get,
        Command::Delete,
        Command::Exit,
    ];

    /// The menu line: `(P)utBlob | (L)istBlobs | ...`.
    pub fn menu() -> String {
        Self::ALL
            .iter()
            .map(|c| {
                let name = c.to_string();
                let (key, rest) = name.split_at(1);
                format!("({key}){rest}")
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Parse the first whitespace separated token of `input`.
    ///
    /// Matching is exact and case sensitive, anything else is `None`.
    pub fn parse(input: &str) -> Option<Command> {
        match input.split_whitespace().next()? {
            "P" => Some(Command::Upload),
            "L" => Some(Command::List),
            "G" => Some(Command::Get),
            "D" => Some(Command::Delete),
            "E" => Some(Command::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Upload => "PutBlob",
            Command::List => "ListBlobs",
            Command::Get => "GetBlob",
            Command::Delete => "DeleteBlobs",
            Command::Exit => "ExitSample",
        };
        f.write_str(name)
    }
}

/// States of the command loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    /// Waiting for the next line of input.
    #[default]
    WaitingForCommand,
    /// A command was read and is being handed to its handler.
    Dispatching(Command),
    /// `E` or end of input was read; terminal.
    Exiting,
}

/// Drives [`State`] from lines of input.
#[derive(Debug, Default)]
pub struct Dispatcher {
    state: State,
}

impl Dispatcher {
    /// Start in [`State::WaitingForCommand`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Feed one line of input, `None` meaning end of input.
    ///
    /// Returns the command to run. Unrecognized input returns `None` and leaves the state
    /// untouched. Nothing is accepted once exiting.
    pub fn accept(&mut self, input: Option<&str>) -> Option<Command> {
        if self.state != State::WaitingForCommand {
            return None;
        }

        let command = match input {
            None => Command::Exit,
            Some(line) => Command::parse(line)?,
        };
        self.state = match command {
            Command::Exit => State::Exiting,
            command => State::Dispatching(command),
        };
        Some(command)
    }

    /// The handler of the current command has been started, go back to waiting.
    pub fn dispatched(&mut self) {
        if let State::Dispatching(_) = self.state {
            self.state = State::WaitingForCommand;
        }
    }

    /// Whether the loop is done.
    pub fn is_exiting(&self) -> bool {
        self.state == State::Exiting
    }
}

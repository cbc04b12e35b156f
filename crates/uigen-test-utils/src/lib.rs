//! Testing utilities for UIGEN workspace
//!
//! Scripted generation service and TSX fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use uigen_stream::{
    EventStream, FinishReason, GenerationService, ServiceRequest, StreamError, StreamEvent,
    TransportError,
};

/// One scripted response to `open`
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream these events, then end
    Events(Vec<StreamEvent>),
    /// Fail to open
    Fail(TransportError),
    /// Open, then never yield
    Hang,
    /// Wait, then stream these events
    Delayed(Duration, Vec<StreamEvent>),
}

/// Answer `text` in one delta, finished normally
pub fn stop(text: &str) -> Script {
    Script::Events(vec![
        StreamEvent::Delta(text.to_string()),
        StreamEvent::FinishReason(FinishReason::Stop),
    ])
}

/// Answer `text` in one delta, cut by the output ceiling
pub fn cut(text: &str) -> Script {
    Script::Events(vec![
        StreamEvent::Delta(text.to_string()),
        StreamEvent::FinishReason(FinishReason::Length),
    ])
}

/// Answer `text` in the given chunks with `finish`
pub fn chunked(chunks: &[&str], finish: FinishReason) -> Script {
    let mut events: Vec<_> = chunks
        .iter()
        .map(|c| StreamEvent::Delta((*c).to_string()))
        .collect();
    events.push(StreamEvent::FinishReason(finish));
    Script::Events(events)
}

/// Answer `text`, then break off with a stream error
pub fn broken(text: &str) -> Script {
    Script::Events(vec![
        StreamEvent::Delta(text.to_string()),
        StreamEvent::StreamError(StreamError::Interrupted("connection reset".to_string())),
    ])
}

/// Wrap `code` the way chat models usually answer
pub fn fenced(code: &str) -> String {
    format!("Here is the component:\n\n```tsx\n{code}```\n\nLet me know if you need changes.")
}

/// Generation service that replays a fixed script and records requests
#[derive(Debug, Default)]
pub struct ScriptedService {
    script: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ServiceRequest>>,
}

impl ScriptedService {
    pub fn new(script: impl IntoIterator<Item = Script>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request seen so far
    pub fn requests(&self) -> Vec<ServiceRequest> {
        self.requests.lock().clone()
    }

    /// Number of `open` calls, transport retries included
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Scripted responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    /// Content of the last message of request `index`
    pub fn last_message(&self, index: usize) -> Option<String> {
        self.requests
            .lock()
            .get(index)
            .and_then(|r| r.messages.last())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn open(&self, request: &ServiceRequest) -> Result<EventStream, TransportError> {
        self.requests.lock().push(request.clone());
        let next = self.script.lock().pop_front();
        match next {
            Some(Script::Events(events)) => Ok(stream::iter(events).boxed()),
            Some(Script::Fail(error)) => Err(error),
            Some(Script::Hang) => Ok(stream::pending().boxed()),
            Some(Script::Delayed(delay, events)) => {
                tokio::time::sleep(delay).await;
                Ok(stream::iter(events).boxed())
            }
            None => Err(TransportError::Status {
                status: 410,
                body: "script exhausted".to_string(),
            }),
        }
    }
}

/// Complete counter using react and lodash
pub const COUNTER: &str = r#"import React, { useState } from 'react';
import debounce from 'lodash';

export default function Counter() {
  const [count, setCount] = useState(0);
  const bump = debounce(() => setCount((c) => c + 1), 100);
  return (
    <div className="counter">
      <span>{count}</span>
      <button onClick={bump}>+1</button>
    </div>
  );
}
"#;

/// Complete clock that also imports moment
pub const CLOCK_WITH_MOMENT: &str = r#"import React from 'react';
import _ from 'lodash';
import moment from 'moment';

export const Clock = ({ times }: { times: number[] }) => (
  <ul>
    {_.uniq(times).map((t) => (
      <li key={t}>{moment(t).format('HH:mm')}</li>
    ))}
  </ul>
);
"#;

/// Complete clock without moment
pub const CLOCK: &str = r#"import React from 'react';
import _ from 'lodash';

export const Clock = ({ times }: { times: number[] }) => (
  <ul>
    {_.uniq(times).map((t) => (
      <li key={t}>{new Date(t).toLocaleTimeString()}</li>
    ))}
  </ul>
);
"#;

/// Malformed mid-file: a stray closer that no suffix can repair
pub const STRAY_BRACE: &str = r#"import React from 'react';

export function Broken() {
  const items = [1, 2, 3];
  }
  return <p>{items.length}</p>;
}
"#;

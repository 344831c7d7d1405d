//! Minimal server-sent events reader for streamed completions

/// Marker the API sends after the last chunk
pub const DONE_MARKER: &str = "[DONE]";

/// Accumulates raw bytes and yields the `data` payload of each event.
///
/// Bytes are buffered until a full line arrives, so multi-byte
/// characters split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseParser
{   buffer: Vec<u8>
  , data: Option<String>
}

impl SseParser
{   pub fn new() -> Self
    {   Self::default()
    }

    /// Feed a network chunk, returning every event it completed
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String>
    {   self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n')
        {   let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..pos]);
            let line = line.trim_end_matches('\r');

            if let Some(event) = self.process_line(line)
            {   events.push(event);
            }
        }

        events
    }

    /// Flush an event left open when the stream ended without a blank line
    pub fn finish(&mut self) -> Option<String>
    {   if !self.buffer.is_empty()
        {   let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).into_owned();
            if let Some(event) = self.process_line(line.trim_end_matches('\r'))
            {   return Some(event);
            }
        }
        self.data.take()
    }

    fn process_line(&mut self, line: &str) -> Option<String>
    {   if line.is_empty()
        {   return self.data.take();
        }

        // comment
        if line.starts_with(':')
        {   return None;
        }

        let (field, value) = match line.split_once(':')
        {   Some((field, value)) => {
              (field, value.strip_prefix(' ').unwrap_or(value))
            }
          , None => (line, "")
        };

        if field == "data"
        {   match self.data.as_mut()
            {   Some(data) => {
                  data.push('\n');
                  data.push_str(value);
                }
              , None => self.data = Some(value.to_string())
            }
        }
        None
    }
}

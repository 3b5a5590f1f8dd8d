//! Message framing on top of a byte stream.
//!
//! Each wire message travels as a big endian `u32` length followed by that many bytes.
use ::std::io;
use ::tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

// TODO: move to `VecDeque` or a cursor if draining the front shows up in profiles
pub struct Reader<R> {
    half: R,
    buf: Vec<u8>,
    max_len: usize,
}
impl<R: AsyncRead + Unpin> Reader<R> {
    pub fn new(half: R, max_len: usize) -> Self {
        Self { half, buf: Vec::with_capacity(1024), max_len }
    }

    /// Read one complete message.
    ///
    /// `Ok(None)` means the peer closed the stream between messages.
    pub async fn read(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let [a, b, c, d, ref rest @ ..] = *self.buf {
                let len = u32::from_be_bytes([a, b, c, d]) as usize;
                if len > self.max_len {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("message of {} bytes exceeds the {} byte limit", len, self.max_len),
                    ))
                }
                if rest.len() >= len {
                    let msg = rest[..len].to_vec();
                    // remove the now handled message from the buffer
                    self.buf.drain(..4 + len);
                    return Ok(Some(msg))
                }
            }
            match self.half.read_buf(&mut self.buf).await? {
                0 if self.buf.is_empty() => return Ok(None),
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "stream ended in the middle of a message",
                    ))
                },
                _ => (),
            }
        }
    }
}

pub struct Writer<W> {
    half: W,
}
impl<W: AsyncWrite + Unpin> Writer<W> {
    pub fn new(half: W) -> Self {
        Self { half }
    }

    pub async fn write(&mut self, msg: &[u8]) -> io::Result<()> {
        let len = u32::try_from(msg.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "message too long to frame"))?;
        self.half.write_all(&len.to_be_bytes()).await?;
        self.half.write_all(msg).await?;
        self.half.flush().await
    }
}

use crate::error::QueryError;
use crate::Config;
use std::io::{ErrorKind, Read, Write};
use std::net::{ToSocketAddrs, UdpSocket};

/// Byte oriented, already connected channel to a time server.
///
/// The exchange writes one request and reads one reply through this trait. Both calls may
/// block; any timeout belongs to the implementation.
pub trait Transport {
    /// Sends `buf`, returns the number of bytes accepted.
    fn send(&mut self, buf: &[u8]) -> std::io::Result<usize>;

    /// Receives into `buf`, returns the number of bytes read. Zero means the peer closed the
    /// channel.
    fn receive(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        (**self).send(buf)
    }

    fn receive(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        (**self).receive(buf)
    }
}

/// A connected [`UdpSocket`] sends and receives whole datagrams.
impl Transport for UdpSocket {
    fn send(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        UdpSocket::send(self, buf)
    }

    fn receive(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        UdpSocket::recv(self, buf)
    }
}

/// UDP transport configured from a [`Config`]
pub struct UdpTransport(UdpSocket);

impl UdpTransport {
    /// Binds to the configured local address, applies the timeout and connects.
    pub fn connect<A: ToSocketAddrs>(addr: A, config: &Config) -> Result<UdpTransport, QueryError> {
        let socket = UdpSocket::bind(config.bind_address)?;
        socket.set_read_timeout(Some(config.timeout))?;
        socket.set_write_timeout(Some(config.timeout))?;
        socket.connect(addr)?;

        log::debug!("Connected {:?} to {:?}", socket.local_addr(), socket.peer_addr());

        Ok(UdpTransport(socket))
    }

    pub fn into_inner(self) -> UdpSocket {
        self.0
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.send(buf)
    }

    fn receive(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.recv(buf)
    }
}

/// Adapts a byte stream (e.g. a `TcpStream` or a pipe) to [`Transport`].
///
/// A stream may deliver the reply in pieces, so `receive` keeps reading until the buffer is
/// full or the stream ends.
pub struct StreamTransport<S>(S);

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> StreamTransport<S> {
        StreamTransport(stream)
    }

    pub fn into_inner(self) -> S {
        self.0
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.0.write(buf)?;
        self.0.flush()?;

        Ok(written)
    }

    fn receive(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.0.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        written: Vec<u8>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.data[self.pos];
            self.pos += 1;

            Ok(1)
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_transport_collects_partial_reads() {
        let mut transport = StreamTransport::new(Trickle {
            data: (0..48).collect(),
            pos: 0,
            written: Vec::new(),
        });
        let mut buf = [0; 48];

        assert_eq!(transport.send(&[1, 2, 3]).unwrap(), 3);
        assert_eq!(transport.receive(&mut buf).unwrap(), 48);
        assert_eq!(buf[47], 47);
        assert_eq!(transport.into_inner().written, vec![1, 2, 3]);
    }

    #[test]
    fn stream_transport_stops_at_end_of_stream() {
        let mut transport = StreamTransport::new(Cursor::new(vec![7u8; 10]));
        let mut buf = [0; 48];

        assert_eq!(transport.receive(&mut buf).unwrap(), 10);
    }

    #[test]
    fn connected_udp_socket_is_a_transport() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let mut client =
            UdpTransport::connect(server.local_addr().unwrap(), &Config::default()).unwrap();

        assert_eq!(client.send(&[0x1b; 48]).unwrap(), 48);

        let mut buf = [0; 64];
        let (len, peer) = server.recv_from(&mut buf).unwrap();
        assert_eq!(len, 48);

        server.send_to(&buf[..len], peer).unwrap();
        let mut reply = [0; 48];
        assert_eq!(client.receive(&mut reply).unwrap(), 48);
        assert_eq!(reply[0], 0x1b);
    }
}

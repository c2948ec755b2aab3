//! Runs the exchange over a socket set up by the caller instead of [`ntp_query::NtpClient`].
use ntp_query::{query, Validation};
use std::net::UdpSocket;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_read_timeout(Some(Duration::from_secs(5)))?;
    socket.connect("time.google.com:123")?;

    let result = query(&mut socket, Validation::Strict)?;
    let time = result.local_time();

    println!(
        "{}-{}-{} {}:{}:{}",
        time.year, time.month, time.day, time.hour, time.minute, time.second
    );

    Ok(())
}

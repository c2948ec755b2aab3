fn main() {
    let client = ntp_query::NtpClient::new();
    let result = client.query("pool.ntp.org").unwrap();

    println!("Server timestamp: {}", result.as_chrono_datetime_utc().unwrap());
    println!("Local time: {}", result.local_time());
    println!("Reference identifier: {}", result.reference_identifier());
    println!("Stratum: {}", result.stratum());
}

#[tokio::main()]
async fn main() -> Result<(), Box<dyn std::error::Error + Sync + Send>> {
    let ntp_server_address = "pool.ntp.org";
    let async_client = ntp_query::AsyncNtpClient::new();

    let result = async_client.query(ntp_server_address).await?;

    println!("Unix timestamp: {}", result.unix_timestamp());
    println!("UTC time: {}", result.utc_time());

    Ok(())
}

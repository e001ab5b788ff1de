use tokio::task;
use unixrpc::{MethodError, RpcClient, RpcServer, Value};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.sock");

    let mut server = RpcServer::bind(&path).unwrap();
    server.register("hello", 1, |arguments: Vec<Value>| async move {
        match arguments[0].as_str() {
            Some(name) => Ok(Value::from(format!("Hello, {name}!"))),
            None => Err(MethodError::new("hello expects a string")),
        }
    });
    task::spawn(server.serve());

    let mut client = RpcClient::connect(&path).await.unwrap();
    println!("server exposes: {:?}", client.methods().collect::<Vec<_>>());

    let greeting = client.call("hello", vec![Value::from("world")]).await.unwrap();
    println!("{greeting:?}");
}

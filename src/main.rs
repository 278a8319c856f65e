//! Blog Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() -> Result<(), blog_backend::StartupError> {
    blog_backend::run().await
}

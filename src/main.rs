mod app;
mod canvas;
mod chat;
mod config;
mod frame_loop;
mod input;
mod logging;
mod particles;
mod theme;
mod ui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}

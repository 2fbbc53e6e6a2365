pub mod gif_server;

pub mod backend_2048_game;

pub mod shared_2048_game;

mod client;
mod stack;
mod state;

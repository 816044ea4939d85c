mod close;
mod initialize;
mod polling;
mod state_machine;

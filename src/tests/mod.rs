mod fake_bus;

mod bus_tests;
mod main_tests;

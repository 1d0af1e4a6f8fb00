mod test_fuel;

mod test_vehicle;

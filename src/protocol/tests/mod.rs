mod control_proptest;

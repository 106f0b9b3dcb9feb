mod proptest_callback;

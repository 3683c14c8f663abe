mod replica_count_test;

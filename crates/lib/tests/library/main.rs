mod deploy_tests;

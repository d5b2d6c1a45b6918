mod tracing;

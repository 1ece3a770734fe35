mod naming;
mod resolver;
mod scheduler;

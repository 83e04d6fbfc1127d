mod helpers;

mod classes;
mod closures;
mod control_flow;
mod functions;
mod natives;
mod redefinition;
mod scenarios;
mod scopes;
